pub mod altsvc;
pub mod record;
pub mod recorder;
