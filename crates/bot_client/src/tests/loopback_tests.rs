use std::sync::Arc;

use shared::{domain::ChannelId, error::ClientError};

use crate::{gateway::ChatGateway, BotClient, ClientEvent, Credentials, LoopbackGateway};

fn creds() -> Credentials {
    Credentials::new("loopback-token", Some("testing".to_string())).unwrap()
}

#[tokio::test]
async fn seeded_directory_hides_unreadable_channels() {
    let client = BotClient::new(Arc::new(LoopbackGateway::seeded()));

    let entries = client.connect(&creds()).await.unwrap();

    assert_eq!(entries.len(), 2);
    let workshop: Vec<&str> = entries[0]
        .channels
        .iter()
        .map(|channel| channel.name.as_str())
        .collect();
    // mod-only is not readable and must never reach the UI.
    assert_eq!(workshop, ["general", "archive"]);
}

#[tokio::test]
async fn history_is_served_newest_first() {
    let client = BotClient::new(Arc::new(LoopbackGateway::seeded()));
    client.connect(&creds()).await.unwrap();

    let lines = client.fetch_history(ChannelId(101), 50).await.unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].text, "anything you send here is echoed back");
    assert_eq!(lines[1].text, "welcome to the loopback backend");
}

#[tokio::test]
async fn archive_history_is_forbidden_but_listed() {
    let client = BotClient::new(Arc::new(LoopbackGateway::seeded()));
    client.connect(&creds()).await.unwrap();

    let err = client.fetch_history(ChannelId(103), 50).await.unwrap_err();

    assert!(matches!(err, ClientError::Permission(ChannelId(103))));
}

#[tokio::test]
async fn sent_messages_echo_back_through_the_event_stream() {
    let gateway: Arc<dyn ChatGateway> = Arc::new(LoopbackGateway::seeded());
    let client = BotClient::new(gateway);
    client.connect(&creds()).await.unwrap();
    let mut events = client.subscribe_events();

    client.send(ChannelId(101), "ping").await.unwrap();

    match events.recv().await.unwrap() {
        ClientEvent::MessageReceived(payload) => {
            assert_eq!(payload.channel_id, ChannelId(101));
            assert_eq!(payload.text, "ping");
        }
        other => panic!("expected echo, got {other:?}"),
    }
}
