pub mod audit_logs;
pub mod bill_lines;
pub mod bills;
pub mod cart_lines;
pub mod carts;
pub mod feedback;
pub mod products;
pub mod survey_results;
pub mod surveys;

pub use audit_logs::Entity as AuditLogs;
pub use bill_lines::Entity as BillLines;
pub use bills::Entity as Bills;
pub use cart_lines::Entity as CartLines;
pub use carts::Entity as Carts;
pub use feedback::Entity as FeedbackEntries;
pub use products::Entity as Products;
pub use survey_results::Entity as SurveyResults;
pub use surveys::Entity as Surveys;
