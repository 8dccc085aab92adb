pub mod booking_flow;
pub mod booking_service;
pub mod conflict_service;
pub mod decision_service;
pub mod slot;
