pub mod script_service;
pub mod session_service;


pub use script_service::ScriptService;
pub use session_service::SessionService;
