//! Thin REST clients for the upstream and downstream collaborators.
//!
//! Each client marshals a request, sends it through the shared HTTP
//! plumbing, and unmarshals the response; branching logic lives with the
//! callers. The traits exist so the orchestration code can be exercised
//! against in-memory fakes.

mod fulcrum;
mod identity;
mod issuer;
mod management;

pub use fulcrum::{FulcrumApi, FulcrumClient};
pub use identity::{IdentityApi, IdentityClient, ParticipantResponse};
pub use issuer::{IssuerApi, IssuerClient};
pub use management::{ManagementApi, ManagementClient};
