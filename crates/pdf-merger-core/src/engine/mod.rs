mod lopdf_engine;
mod traits;

pub use lopdf_engine::LopdfEngine;
pub use traits::{EngineInfo, FragmentOrigin, PdfEngine, PdfFragment};

use std::sync::Arc;

/// Create the default engine
pub fn create_engine() -> Arc<dyn PdfEngine> {
    Arc::new(LopdfEngine::new())
}
