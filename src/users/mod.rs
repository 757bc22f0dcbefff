mod model;
mod repo;

pub use model::{Role, User, UserSummary};
pub use repo::{NewUser, PgUserStore, UserLookup, UserRegistry};
