mod audit_log_tests;
mod exchange_flow;
mod poller_tests;
mod support;
