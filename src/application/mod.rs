// Application layer - Services and state machines
pub mod poller;
pub mod reconciler;
pub mod repository;
pub mod retry;
pub mod sync_service;
