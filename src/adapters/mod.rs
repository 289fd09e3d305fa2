pub mod extract;
pub mod exportersindia;
pub mod indiamart;
pub mod tradeindia;

use crate::types::{SourceAdapter, SourceId};

/// Build the adapter for one platform. New platforms plug in here without
/// touching the orchestrator.
pub fn create_adapter(source: SourceId, search_term: &str) -> Box<dyn SourceAdapter> {
    match source {
        SourceId::TradeIndia => Box::new(tradeindia::TradeIndiaAdapter::new(search_term)),
        SourceId::IndiaMart => Box::new(indiamart::IndiaMartAdapter::new(search_term)),
        SourceId::ExportersIndia => {
            Box::new(exportersindia::ExportersIndiaAdapter::new(search_term))
        }
    }
}
