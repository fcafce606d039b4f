pub mod activity;
pub mod french;
pub mod profiles;
pub mod quotes;

pub use activity::ActivityRow;
pub use french::{FrenchSession, FrenchSessionPatch, NewFrenchSession};
pub use profiles::UserProfile;
pub use quotes::DailyQuote;
