pub mod dart;
pub mod flip7;
pub mod romme;
pub mod schwimmen;
pub mod skyjo;
pub mod wizard;

pub use dart::DartPolicy;
pub use flip7::Flip7Policy;
pub use romme::RommePolicy;
pub use schwimmen::SchwimmenPolicy;
pub use skyjo::SkyjoPolicy;
pub use wizard::WizardPolicy;
