pub mod payment;

pub use payment::{PaymentGateway, PaymentRequest, PaymentStatus};
