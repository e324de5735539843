use parliament::client_wrapper::{ClientWrapper, Message, Role};
use parliament::clients::azure::AzureOpenAIClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answers one request per canned body, closing the connection after each.
async fn serve(bodies: Vec<(u16, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for (status, body) in bodies {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });
    format!("http://{}", addr)
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .next()
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

const WITH_USAGE: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Shauli"}}],"usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#;
const WITHOUT_USAGE: &str = r#"{"choices":[{"message":{"role":"assistant","content":"Avi"}}]}"#;

fn request() -> Vec<Message> {
    vec![
        Message::new(Role::System, "Pick the next speaker."),
        Message::new(Role::User, "Who speaks?"),
    ]
}

#[tokio::test]
async fn test_usage_is_cleared_when_response_omits_it() {
    let endpoint = serve(vec![(200, WITH_USAGE), (200, WITHOUT_USAGE)]).await;
    let client = AzureOpenAIClient::new("key", &endpoint, "2024-10-21", "gpt-4o");

    let reply = client.send_message(&request()).await.unwrap();
    assert_eq!(&*reply.content, "Shauli");
    assert_eq!(client.get_last_usage().await.unwrap().total_tokens, 15);

    let reply = client.send_message(&request()).await.unwrap();
    assert_eq!(&*reply.content, "Avi");
    assert!(client.get_last_usage().await.is_none());
}

#[tokio::test]
async fn test_error_status_carries_azure_message() {
    let endpoint = serve(vec![(
        404,
        r#"{"error":{"code":"DeploymentNotFound","message":"The API deployment for this resource does not exist."}}"#,
    )])
    .await;
    let client = AzureOpenAIClient::new("key", &endpoint, "2024-10-21", "missing");

    let err = client.send_message(&request()).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("404"));
    assert!(text.contains("The API deployment for this resource does not exist."));
}
