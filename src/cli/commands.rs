pub mod createsuperuser;
pub mod initdb;
pub mod serve;

pub use createsuperuser::create_superuser;
pub use initdb::init_database;
pub use serve::serve;
