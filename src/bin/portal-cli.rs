use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(about = "Management CLI for the campus ledger portal", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CAMPUS_PORTAL_URL", default_value = "http://localhost:3000")]
    url: String,

    #[arg(short, long, env = "CAMPUS_ADMIN_API_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Version, store and chain status (admin)
    Status,
    /// List courses
    Courses,
    /// List rooms
    Rooms,
    /// List events
    Events,
    /// List semesters and their fees
    Semesters,
    /// Audit trail of a user's on-chain actions
    Transactions { user_id: i32 },
    /// Create a course (admin)
    AddCourse {
        name: String,
        /// Last day of the course, YYYY-MM-DD
        end_date: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        faculty_id: Option<i32>,
    },
    /// Create a room (admin)
    AddRoom {
        name: String,
        capacity: i32,
        #[arg(long)]
        location: Option<String>,
    },
    /// Create a semester (admin)
    AddSemester {
        name: String,
        /// YYYY-MM-DD
        start_date: String,
        /// YYYY-MM-DD
        end_date: String,
        /// Fee in ETH; the server default applies when omitted
        #[arg(long)]
        fee: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Courses => client.get(format!("{}/api/courses", base)).send().await?,
        Commands::Rooms => client.get(format!("{}/api/rooms", base)).send().await?,
        Commands::Events => client.get(format!("{}/api/events", base)).send().await?,
        Commands::Semesters => client.get(format!("{}/api/semesters", base)).send().await?,
        Commands::Transactions { user_id } => {
            client
                .get(format!("{}/api/users/{}/transactions", base, user_id))
                .send()
                .await?
        }
        Commands::AddCourse {
            name,
            end_date,
            description,
            faculty_id,
        } => {
            let body = json!({
                "course_name": name,
                "end_date": end_date,
                "description": description,
                "faculty_id": faculty_id,
            });
            client
                .post(format!("{}/admin/courses", base))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
        Commands::AddRoom {
            name,
            capacity,
            location,
        } => {
            let body = json!({ "name": name, "capacity": capacity, "location": location });
            client
                .post(format!("{}/admin/rooms", base))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
        Commands::AddSemester {
            name,
            start_date,
            end_date,
            fee,
        } => {
            let body = json!({
                "name": name,
                "start_date": start_date,
                "end_date": end_date,
                "fee_amount": fee,
            });
            client
                .post(format!("{}/admin/semesters", base))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: portal returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
