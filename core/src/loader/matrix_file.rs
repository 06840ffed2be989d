use std::path::Path;

use crate::matrix::{CustomerId, InteractionMatrix, ProductId};

use super::ResourceError;

/// Reads a CSV interaction table: header row of product ids after the index
/// column, then one row per customer with numeric counts.
pub(super) fn read_interaction_matrix(path: &Path) -> Result<InteractionMatrix, ResourceError> {
    if !path.exists() {
        return Err(ResourceError::load(path, "interaction file does not exist"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|error| {
            ResourceError::load(path, format!("failed to open interaction file: {error}"))
        })?;

    let products: Vec<ProductId> = reader
        .headers()
        .map_err(|error| ResourceError::load(path, format!("failed to read header: {error}")))?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows: Vec<(CustomerId, Vec<f32>)> = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        let record = record.map_err(|error| {
            ResourceError::load(path, format!("failed to read line {line}: {error}"))
        })?;

        let mut fields = record.iter();
        let customer = fields.next().unwrap_or_default().to_string();
        let values = fields
            .enumerate()
            .map(|(column, raw)| {
                raw.trim().parse::<f32>().map_err(|error| {
                    let product = products.get(column).map(String::as_str).unwrap_or("?");
                    ResourceError::load(
                        path,
                        format!(
                            "line {line}, product '{product}': invalid interaction '{raw}': {error}"
                        ),
                    )
                })
            })
            .collect::<Result<Vec<f32>, ResourceError>>()?;

        rows.push((customer, values));
    }

    Ok(InteractionMatrix::new(products, rows)?)
}
