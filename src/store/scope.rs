//! Owner-scoped list filters, built once and used by both backends so SQL
//! and in-memory results cannot drift apart.

use uuid::Uuid;

use crate::filter::{CatalogCriteria, Filter, FilterError, LogCriteria, MedicationCriteria, PatternCriteria};

pub fn medications(owner: Uuid, criteria: &MedicationCriteria) -> Result<Filter, FilterError> {
    let mut filter = Filter::new("medications")?;
    filter.where_eq("user_id", owner)?;
    criteria.apply(&mut filter)?;
    Ok(filter)
}

pub fn patterns(owner: Uuid, medication_id: Uuid, criteria: &PatternCriteria) -> Result<Filter, FilterError> {
    let mut filter = Filter::new("medication_patterns")?;
    filter.where_eq("user_id", owner)?.where_eq("medication_id", medication_id)?;
    criteria.apply(&mut filter)?;
    Ok(filter)
}

pub fn logs(owner: Uuid, criteria: &LogCriteria) -> Result<Filter, FilterError> {
    let mut filter = Filter::new("medication_logs")?;
    filter.where_eq("user_id", owner)?;
    criteria.apply(&mut filter)?;
    Ok(filter)
}

pub fn catalog(criteria: &CatalogCriteria) -> Result<Filter, FilterError> {
    let mut filter = Filter::new("side_effect_types")?;
    criteria.apply(&mut filter)?;
    Ok(filter)
}
