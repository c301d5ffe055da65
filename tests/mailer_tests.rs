use anyhow::Result;
use notify_service::clients::mailer::{EmailSender, HttpMailer};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::test_config;

fn mailer_against(server: &MockServer) -> Result<HttpMailer> {
    let mut config = test_config();
    config.mailer_url = server.uri();
    Ok(HttpMailer::new(&config)?)
}

/// Test: Sending an email posts the payload to the gateway
#[tokio::test]
async fn test_send_posts_payload_to_gateway() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/send"))
        .and(body_partial_json(serde_json::json!({
            "to": "recv@example.com",
            "subject": "Hello",
            "body": "A body",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = mailer_against(&server)?;
    mailer.send("recv@example.com", "Hello", "A body").await?;

    Ok(())
}

/// Test: Transient gateway errors are retried until success
#[tokio::test]
async fn test_transient_gateway_errors_are_retried() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/send"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mailer = mailer_against(&server)?;
    mailer.send("recv@example.com", "Hello", "A body").await?;

    Ok(())
}

/// Test: A persistently failing gateway exhausts the retry budget
#[tokio::test]
async fn test_gateway_failure_exhausts_retries() -> Result<()> {
    let server = MockServer::start().await;

    // test_config allows 3 attempts.
    Mock::given(method("POST"))
        .and(path("/api/v1/send"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mailer = mailer_against(&server)?;
    let result = mailer.send("recv@example.com", "Hello", "A body").await;

    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(
        message.contains("recv@example.com"),
        "Error should name the recipient: {}",
        message
    );
    assert!(
        message.contains("503"),
        "Error should carry the status: {}",
        message
    );

    Ok(())
}
