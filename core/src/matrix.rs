use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

pub type CustomerId = String;
pub type ProductId = String;

#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    EmptyVocabulary,
    EmptyProductId { column: usize },
    DuplicateProduct(ProductId),
    EmptyCustomerId { row: usize },
    DuplicateCustomer(CustomerId),
    InvalidDimension {
        customer: CustomerId,
        expected: usize,
        got: usize,
    },
    InvalidValue {
        customer: CustomerId,
        product: ProductId,
        value: f32,
    },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyVocabulary => write!(f, "interaction matrix has no product columns"),
            Self::EmptyProductId { column } => {
                write!(f, "product id in column {column} must not be empty")
            }
            Self::DuplicateProduct(product) => write!(f, "duplicate product column '{product}'"),
            Self::EmptyCustomerId { row } => {
                write!(f, "customer id in row {row} must not be empty")
            }
            Self::DuplicateCustomer(customer) => write!(f, "duplicate customer row '{customer}'"),
            Self::InvalidDimension {
                customer,
                expected,
                got,
            } => write!(
                f,
                "row '{customer}' has {got} values, expected {expected}"
            ),
            Self::InvalidValue {
                customer,
                product,
                value,
            } => write!(
                f,
                "row '{customer}' has invalid interaction {value} for product '{product}'"
            ),
        }
    }
}

impl Error for MatrixError {}

/// Customer x product interaction counts over a fixed product vocabulary.
///
/// Rows keep the order they were supplied in; every row has exactly
/// `products().len()` non-negative, finite entries in vocabulary column order.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    products: Vec<ProductId>,
    customers: Vec<CustomerId>,
    rows: BTreeMap<CustomerId, usize>,
    values: Vec<f32>,
    popularity: Vec<f32>,
}

impl InteractionMatrix {
    pub fn new(
        products: Vec<ProductId>,
        rows: Vec<(CustomerId, Vec<f32>)>,
    ) -> Result<Self, MatrixError> {
        validate_vocabulary(&products)?;

        let dimension = products.len();
        let mut customers = Vec::with_capacity(rows.len());
        let mut positions = BTreeMap::new();
        let mut values = Vec::with_capacity(rows.len().saturating_mul(dimension));
        let mut popularity = vec![0.0f32; dimension];

        for (row, (customer, row_values)) in rows.into_iter().enumerate() {
            if customer.is_empty() {
                return Err(MatrixError::EmptyCustomerId { row });
            }
            if positions.contains_key(&customer) {
                return Err(MatrixError::DuplicateCustomer(customer));
            }
            if row_values.len() != dimension {
                return Err(MatrixError::InvalidDimension {
                    customer,
                    expected: dimension,
                    got: row_values.len(),
                });
            }
            if let Some(column) = row_values
                .iter()
                .position(|value| !value.is_finite() || *value < 0.0)
            {
                return Err(MatrixError::InvalidValue {
                    value: row_values[column],
                    product: products[column].clone(),
                    customer,
                });
            }

            for (total, value) in popularity.iter_mut().zip(&row_values) {
                *total += value;
            }
            values.extend_from_slice(&row_values);
            positions.insert(customer.clone(), row);
            customers.push(customer);
        }

        Ok(Self {
            products,
            customers,
            rows: positions,
            values,
            popularity,
        })
    }

    /// Product vocabulary in column order.
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    /// Customer ids in row order.
    pub fn customer_ids(&self) -> &[CustomerId] {
        &self.customers
    }

    pub fn dimension(&self) -> usize {
        self.products.len()
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn contains(&self, customer: &str) -> bool {
        self.rows.contains_key(customer)
    }

    pub fn row(&self, customer: &str) -> Option<&[f32]> {
        self.rows
            .get(customer)
            .map(|position| self.row_at(*position))
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.customers
            .iter()
            .enumerate()
            .map(|(position, customer)| (customer.as_str(), self.row_at(position)))
    }

    /// Per-product column sums across every customer.
    pub fn popularity(&self) -> &[f32] {
        &self.popularity
    }

    fn row_at(&self, position: usize) -> &[f32] {
        let dimension = self.dimension();
        let start = position * dimension;
        &self.values[start..start + dimension]
    }
}

fn validate_vocabulary(products: &[ProductId]) -> Result<(), MatrixError> {
    if products.is_empty() {
        return Err(MatrixError::EmptyVocabulary);
    }

    let mut seen = BTreeMap::new();
    for (column, product) in products.iter().enumerate() {
        if product.trim().is_empty() {
            return Err(MatrixError::EmptyProductId { column });
        }
        if seen.insert(product.as_str(), column).is_some() {
            return Err(MatrixError::DuplicateProduct(product.clone()));
        }
    }
    Ok(())
}
