use reqwest::Client;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let base_url = "http://127.0.0.1:3000";
    let token = std::env::var("API_TOKEN").unwrap_or_else(|_| "local-dev-token-123".to_string());

    println!("Health check:");
    let health_response = client.get(format!("{}/health", base_url)).send().await?;
    println!("Status: {}", health_response.status());

    let payload = json!({
        "documents": "https://example.com/sample-policy.pdf",
        "questions": [
            "46M, knee surgery, Pune, 3-month policy",
            "Is maternity cover included?"
        ]
    });

    println!("\nAnalyze:");
    let response = client
        .post(format!("{}/analyze", base_url))
        .bearer_auth(&token)
        .json(&payload)
        .send()
        .await?;

    println!("Status: {}", response.status());
    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
