mod support;

mod mailer_tests;
mod retry_tests;
