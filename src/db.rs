pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod directory_repo;
pub use directory_repo::DirectoryRepository;
pub mod feedback_repo;
pub use feedback_repo::FeedbackRepository;
pub mod lancamento_repo;
pub use lancamento_repo::LancamentoRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
