//! Live provider connection tests.
//!
//! Each [`ConnectionTester`] declares the providers it supports; the
//! [`ConnectionTestDispatcher`] picks the first match and bounds the call
//! with a timeout. Kakao Pay and Naver Pay ship without a tester.

mod dispatcher;
mod iamport;
mod paypal;
mod stripe;
mod tester;
mod toss;

pub use dispatcher::ConnectionTestDispatcher;
pub use iamport::IamportTester;
pub use paypal::PaypalTester;
pub use stripe::StripeTester;
pub use tester::{ConnectionTestResult, ConnectionTester, ProviderCredentials, preflight};
pub use toss::TossTester;
