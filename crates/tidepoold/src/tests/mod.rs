//! Test suites for the tidepool daemon.

mod support;
