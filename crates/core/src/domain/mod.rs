mod phase;
mod priority;
mod provider;

pub use phase::Phase;
pub use priority::ServicePriority;
pub use provider::ProviderCategory;
