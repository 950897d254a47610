// Event model and validation
pub mod event;

// State engine and entity management
pub mod state;

// HTTP and WebSocket APIs
pub mod api;

// NATS client integration
pub mod nats;

// Subscription management
pub mod subscription;

// Bearer token extraction (HTTP and WebSocket)
pub mod auth;

// Runtime and file-based configuration
pub mod config;

// Encrypted credential storage for OAuth tokens
pub mod credentials;

// Entity ID parsing (namespace/entity format)
pub mod entity;

// Namespace registration and token auth
pub mod namespace;

// Per-namespace rate limiting
pub mod rate_limit;

// Snapshot persistence and recovery
pub mod snapshot;

pub use event::FluxEvent;
