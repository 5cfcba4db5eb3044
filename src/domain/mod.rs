pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use entities::{Admission, PaymentGuard, PaymentSession, SessionId, STALE_THRESHOLD_MS};
pub use errors::{DomainError, DomainResult};
pub use events::*;
pub use value_objects::{
    ALIPAY_SDK_REQUEST_CODE, Environment, FormattedResult, PaymentOutcome, ResultStatus,
    SdkPayload,
};
