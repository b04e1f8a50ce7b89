//! AGPL license consent, persisted in the local state database.

use crate::api::ConsoleClient;
use crate::db;
use crate::errors::{ConsoleError, ConsoleResult};

pub const LICENSE_ACK_URL: &str = "https://dl.min.io/server/minio/agplv3-ack";

const CONSENT_KEY: &str = "license_acknowledged";

fn db_error(err: Box<dyn std::error::Error + Send + Sync>) -> ConsoleError {
    ConsoleError::Db(err.to_string())
}

pub async fn license_consent_given() -> ConsoleResult<bool> {
    let value = db::get_app_state(CONSENT_KEY).await.map_err(db_error)?;
    Ok(value.as_deref() == Some("true"))
}

/// Tell the console the license was acknowledged, then remember it locally.
///
/// The flag is only stored once the server accepted the acknowledgement.
pub async fn acknowledge_license(client: &ConsoleClient) -> ConsoleResult<()> {
    client.license_acknowledge().await?;
    db::set_app_state(CONSENT_KEY, "true")
        .await
        .map_err(db_error)?;
    log::info!("license acknowledged ({})", LICENSE_ACK_URL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn consent_is_stored_only_after_server_accepts() {
        init_test_db().await;
        db::delete_app_state(CONSENT_KEY).await.unwrap();

        let rejecting = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/license/acknowledge"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&rejecting)
            .await;
        let client = ConsoleClient::new(rejecting.uri(), None, false).unwrap();
        assert!(matches!(
            acknowledge_license(&client).await,
            Err(ConsoleError::Http { status: 500, .. })
        ));
        assert!(!license_consent_given().await.unwrap());

        let accepting = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/license/acknowledge"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&accepting)
            .await;
        let client = ConsoleClient::new(accepting.uri(), None, false).unwrap();
        acknowledge_license(&client).await.unwrap();
        assert!(license_consent_given().await.unwrap());
    }
}
