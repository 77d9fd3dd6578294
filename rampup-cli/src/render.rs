use chrono::Utc;

use rampup_core::{group_by_topic, Article, Company};

/// Prints one view's article list, bucketed by topic, with the projected
/// read/saved markers.
pub fn articles(title: &str, articles: &[Article], last_updated: Option<i64>) {
    println!("== {title} ==");
    if let Some(ts) = last_updated {
        println!("Updated: {}", age_text(ts));
    }
    if articles.is_empty() {
        println!("No articles.");
        return;
    }
    for (topic, bucket) in group_by_topic(articles) {
        println!();
        println!("--- {topic} ---");
        if bucket.is_empty() {
            println!("No recent news found.");
            continue;
        }
        for article in &bucket {
            print_article(article);
        }
    }
}

pub fn companies(companies: &[Company]) {
    println!("== Tracked Companies ==");
    for company in companies {
        println!("{:>6}  {}  {}", company.id, company.name, company.blog_url);
    }
}

fn print_article(article: &Article) {
    let read_mark = if article.is_read { "x" } else { " " };
    let saved_mark = if article.is_saved { " *saved*" } else { "" };
    println!("[{read_mark}] {} ({}){saved_mark}", article.title, article.id);
    match &article.published_date {
        Some(date) => println!("    {} | {date}", article.source),
        None => println!("    {}", article.source),
    }
    println!("    {}", article.url);
    for bullet in &article.summary {
        println!("    - {bullet}");
    }
}

fn age_text(last_updated: i64) -> String {
    if last_updated == 0 {
        return "Never".to_owned();
    }
    let mins = (Utc::now().timestamp_millis() - last_updated) / 60_000;
    if mins < 1 {
        "Just now".to_owned()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else {
        format!("{}h ago", mins / 60)
    }
}
