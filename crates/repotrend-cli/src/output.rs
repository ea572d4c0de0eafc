// Plain-text and JSON rendering for the terminal
use repotrend_core::{DataSource, Repository};

pub fn repository_line(repo: &Repository) -> String {
    let marker = if repo.is_favorite { "★" } else { " " };
    let language = repo.language.as_deref().unwrap_or("-");
    format!(
        "{} {:<40} ⭐ {:>7}  🍴 {:>6}  {}",
        marker, repo.full_name, repo.stars, repo.forks, language
    )
}

pub fn print_list(repos: &[Repository], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(repos)?);
        return Ok(());
    }

    if repos.is_empty() {
        println!("No repositories found");
        return Ok(());
    }

    for repo in repos {
        println!("{}", repository_line(repo));
        println!("    {}", repo.description_or_default());
    }
    Ok(())
}

pub fn detail_lines(repo: &Repository, source: DataSource) -> Vec<String> {
    let origin = match source {
        DataSource::Local => "local store",
        DataSource::Server => "GitHub",
        DataSource::Unknown => "unknown",
    };

    vec![
        format!(
            "{}{}",
            repo.full_name,
            if repo.is_favorite { "  ★ favorite" } else { "" }
        ),
        repo.description_or_default().to_string(),
        format!("Owner:    {}", repo.owner.login),
        format!("Language: {}", repo.language.as_deref().unwrap_or("-")),
        format!("Stars:    {}", repo.stars),
        format!("Forks:    {}", repo.forks),
        format!("Created:  {}", repo.created_at.format("%Y-%m-%d")),
        format!("URL:      {}", repo.html_url),
        format!("Source:   {}", origin),
    ]
}

pub fn print_detail(repo: &Repository, source: DataSource, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(repo)?);
    } else {
        for line in detail_lines(repo, source) {
            println!("{}", line);
        }
    }
    Ok(())
}
