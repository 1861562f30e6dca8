pub mod capture;
pub mod clock;
pub mod mailbox;
pub mod pose;
pub mod profiler;
pub mod sim;
