pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod page;
pub mod query;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use page::{Page, PageMeta, PageRequest};
pub use query::{
    CatalogCriteria, LogCriteria, LogQuery, MedicationCriteria, MedicationQuery, PatternCriteria, PatternQuery,
};
pub use types::*;
