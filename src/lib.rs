//! Kickbox HubSpot API Library
//!
//! Verifies HubSpot contact emails with Kickbox and writes the results back
//! onto the contact as `kickbox_*` properties.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `card`: Display shaping of stored verification results.
//! - `coercion`: Total conversions of loosely typed JSON values.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `hubspot_client`: HubSpot CRM contacts client.
//! - `invocation_models`: Request and response payloads of each invocation context.
//! - `kickbox_client`: Kickbox verification client.
//! - `models`: Core data models.
//! - `normalizer`: Raw Kickbox response to canonical result.
//! - `openapi`: OpenAPI document.
//! - `pipeline`: Verification pipeline and invocation contexts.
//! - `property_mapper`: Canonical result to HubSpot property patch.

pub mod api;
pub mod core;
pub mod integrations;

pub mod card;
pub mod coercion;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hubspot_client;
pub mod invocation_models;
pub mod kickbox_client;
pub mod models;
pub mod normalizer;
pub mod openapi;
pub mod pipeline;
pub mod property_mapper;
