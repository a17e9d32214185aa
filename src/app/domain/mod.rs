pub mod address;
pub mod email;
pub mod form;

pub use address::Address;
pub use email::Email;
pub use form::FormValues;
