use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    callback::CallbackParser, flow::FlowState, gateway::PaymentApi, poller::PollPolicy,
    poller::StatusPoller,
};

/// In-flight payment flows of this process. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct FlowStore(Arc<RwLock<HashMap<Uuid, FlowState>>>);

impl FlowStore {
    pub async fn insert(&self, flow: FlowState) -> Uuid {
        let id = Uuid::new_v4();
        self.0.write().await.insert(id, flow);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<FlowState> {
        self.0.read().await.get(id).cloned()
    }

    /// Replace a flow, returns false when it has been removed meanwhile
    pub async fn put(&self, id: &Uuid, flow: FlowState) -> bool {
        match self.0.write().await.get_mut(id) {
            Some(slot) => {
                *slot = flow;
                true
            }
            None => false,
        }
    }

    /// Apply a synchronous update under the write lock
    pub async fn update<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(FlowState) -> (FlowState, R),
    ) -> Option<R> {
        let mut flows = self.0.write().await;
        let slot = flows.get_mut(id)?;
        let (next, result) = f(slot.clone());
        *slot = next;
        Some(result)
    }

    pub async fn remove(&self, id: &Uuid) -> Option<FlowState> {
        self.0.write().await.remove(id)
    }
}

#[derive(Debug, Clone, axum::extract::FromRef)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentApi>,
    pub poller: StatusPoller,
    pub flows: FlowStore,
    pub callback_parser: CallbackParser,
    pub poll_policy: PollPolicy,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn PaymentApi>,
        callback_parser: CallbackParser,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            poller: StatusPoller::new(gateway.clone()),
            gateway,
            flows: FlowStore::default(),
            callback_parser,
            poll_policy,
        }
    }
}
