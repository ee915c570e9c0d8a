//! Data models for the circulation server

pub mod loan;
pub mod report;
pub mod title;
pub mod user;

// Re-export commonly used types
pub use loan::{Loan, LoanDetails, LoanStatus};
pub use title::{Title, TitleDraft, TitleView};
pub use user::{CurrentUser, Role};
