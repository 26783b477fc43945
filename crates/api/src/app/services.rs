//! Engine services wired over one shared store.

use std::sync::Arc;

use fieldstock_infra::{
    InventoryAnalytics, JobMaterialAllocator, LedgerStore, StockLedger, ToolLifecycleManager,
};

type SharedStore = Arc<dyn LedgerStore>;

/// All application services, sharing one store handle.
pub struct AppServices {
    pub ledger: StockLedger<SharedStore>,
    pub allocator: JobMaterialAllocator<SharedStore>,
    pub tools: ToolLifecycleManager<SharedStore>,
    pub analytics: InventoryAnalytics<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            ledger: StockLedger::new(store.clone()),
            allocator: JobMaterialAllocator::new(store.clone()),
            tools: ToolLifecycleManager::new(store.clone()),
            analytics: InventoryAnalytics::new(store),
        }
    }
}
