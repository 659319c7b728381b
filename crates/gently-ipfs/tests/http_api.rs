//! Pin API over real HTTP against a mock daemon

use gently_ipfs::{
    ApiConfig, CancellationToken, ContentPath, Error, IpfsClient, PinAddOptions, PinLsOptions,
    PinUpdateOptions, VerifyOutcome,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CID_A: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const CID_B: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

fn client_for(server: &MockServer) -> IpfsClient {
    IpfsClient::new(ApiConfig::with_address(&server.uri()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_add_posts_to_pin_add() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/add"))
        .and(query_param("arg", format!("/ipfs/{}", CID_A)))
        .and(query_param("recursive", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "Pins": [CID_A] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .pin()
        .add(&ContentPath::parse(CID_A).unwrap(), PinAddOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_daemon_error_message_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/rm"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "Message": "not pinned or pinned indirectly",
            "Code": 0,
            "Type": "error"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .pin()
        .rm(&ContentPath::parse(CID_A).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Remote(_)));
    assert_eq!(err.to_string(), "not pinned or pinned indirectly");
}

#[tokio::test]
async fn test_ls_decodes_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/ls"))
        .and(query_param("type", "recursive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Keys": { CID_B: { "Type": "recursive" } }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let pins = client
        .pin()
        .ls(PinLsOptions::new().type_filter("recursive"))
        .await
        .unwrap();

    assert_eq!(pins.len(), 1);
    assert_eq!(pins[0].pin_type(), "recursive");
    assert_eq!(pins[0].path().to_string(), format!("/ipld/{}", CID_B));
}

#[tokio::test]
async fn test_update_sends_from_then_to() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/update"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .pin()
        .update(
            &ContentPath::parse(CID_A).unwrap(),
            &ContentPath::parse(CID_B).unwrap(),
            PinUpdateOptions::new().unpin(false),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        query,
        vec![
            ("arg".to_string(), format!("/ipfs/{}", CID_A)),
            ("arg".to_string(), format!("/ipfs/{}", CID_B)),
            ("unpin".to_string(), "false".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_verify_streams_records() {
    let server = MockServer::start().await;
    let body = format!(
        concat!(
            r#"{{"Cid":"{}","Ok":true}}"#,
            "\n",
            r#"{{"Cid":"{}","Ok":false,"BadNodes":["#,
            r#"{{"Cid":"{}","Err":"merkledag: not found"}}]}}"#,
            "\n",
        ),
        CID_A,
        CID_B,
        CID_A
    );
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/verify"))
        .and(query_param("verbose", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream = client.pin().verify(CancellationToken::new()).await.unwrap();

    let first = stream.next().await.unwrap();
    assert_eq!(first.cid(), CID_A);
    assert!(first.ok());

    let second = stream.next().await.unwrap();
    assert_eq!(second.cid(), CID_B);
    assert!(!second.ok());
    assert_eq!(second.bad_nodes()[0].err().unwrap().to_string(), "merkledag: not found");

    assert!(stream.next().await.is_none());
    assert!(matches!(stream.finish().await, VerifyOutcome::Exhausted));
}

#[tokio::test]
async fn test_unreachable_daemon_is_connection_error() {
    let client = IpfsClient::new(ApiConfig::with_address("http://127.0.0.1:1").unwrap()).unwrap();

    let result = client.pin().verify(CancellationToken::new()).await;
    assert!(matches!(result, Err(Error::ConnectionFailed(_))));
}
