// handlers/mod.rs - two tiers
//
// public:    no bearer token (token exchange, catalog, service info)
// protected: behind `middleware::require_auth`, scoped to the resolved user
pub mod protected;
pub mod public;
