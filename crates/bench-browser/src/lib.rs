//! BrowserExecutor: drives a single isolated browser session and turns
//! each proposed action into a Snapshot.

pub mod chrome;
pub mod driver;
pub mod executor;
pub mod locator;
pub mod scripted;

pub use chrome::ChromeDriver;
pub use driver::{BrowserContext, BrowserDriver, DriverError};
pub use executor::{BrowserExecutor, ExecutorConfig};
pub use scripted::ScriptedDriver;
