use crate::catalog::CatalogService;

/// Shared handler state. The catalog service owns the store handle; there is
/// no other process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }
}
