pub mod policy;
pub mod principal;

pub use policy::AuthorizationPolicy;
pub use policy::RouteRule;
pub use principal::Principal;
