//! Account and registry commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{
    ApiClient, DockerImage, DockerVolume, LoginRequest, NewUser, PullRequest, PullResponse, User,
};
use crate::config::Config;
use crate::output::{
    color_status, format_date, print_info, print_json, print_success, print_table, OutputFormat,
};

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Repository")]
    repository: String,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Mountpoint")]
    mountpoint: String,
}

pub async fn list_users(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let users: Vec<User> = client.get("api/v1/users").await?;

    match format {
        OutputFormat::Json => print_json(&users)?,
        OutputFormat::Table => {
            let rows: Vec<UserRow> = users
                .iter()
                .map(|u| UserRow {
                    id: u.id.clone(),
                    username: u.username.clone(),
                    role: u.role.clone(),
                    created: format_date(&u.created),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

pub async fn add_user(client: &ApiClient, new_user: NewUser, format: OutputFormat) -> Result<()> {
    let user: User = client.post("api/v1/users", &new_user).await?;

    match format {
        OutputFormat::Json => print_json(&user)?,
        OutputFormat::Table => {
            print_success(&format!("User {} created ({})", user.username, user.role))
        }
    }
    Ok(())
}

/// Check credentials and remember the user for later commands
pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
    format: OutputFormat,
) -> Result<()> {
    let user: User = client
        .post(
            "api/v1/login",
            &LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            },
        )
        .await?;

    let mut config = Config::load()?;
    config.user = Some(user.username.clone());
    config.save()?;

    match format {
        OutputFormat::Json => print_json(&user)?,
        OutputFormat::Table => {
            print_success(&format!("Logged in as {} ({})", user.username, user.role))
        }
    }
    Ok(())
}

pub async fn list_images(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let images: Vec<DockerImage> = client.get("api/v1/images").await?;

    match format {
        OutputFormat::Json => print_json(&images)?,
        OutputFormat::Table => {
            let rows: Vec<ImageRow> = images
                .iter()
                .map(|i| ImageRow {
                    id: i.id.clone(),
                    repository: i.repository.clone(),
                    tag: i.tag.clone(),
                    size: i.size.clone(),
                    created: i.created.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

pub async fn pull_image(client: &ApiClient, reference: &str, format: OutputFormat) -> Result<()> {
    let response: PullResponse = client
        .post(
            "api/v1/images/pull",
            &PullRequest {
                reference: reference.to_string(),
            },
        )
        .await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let reference = format!("{}:{}", response.image.repository, response.image.tag);
            if response.pulled {
                print_success(&format!("Pulled {} ({})", reference, response.image.size));
            } else {
                print_info(&format!("Image {} is already present", reference));
            }
        }
    }
    Ok(())
}

pub async fn delete_image(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let image: DockerImage = client.delete(&format!("api/v1/images/{}", id)).await?;

    match format {
        OutputFormat::Json => print_json(&image)?,
        OutputFormat::Table => {
            print_success(&format!("Deleted image {}:{}", image.repository, image.tag))
        }
    }
    Ok(())
}

pub async fn list_volumes(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let volumes: Vec<DockerVolume> = client.get("api/v1/volumes").await?;

    match format {
        OutputFormat::Json => print_json(&volumes)?,
        OutputFormat::Table => {
            let rows: Vec<VolumeRow> = volumes
                .iter()
                .map(|v| VolumeRow {
                    name: v.name.clone(),
                    driver: v.driver.clone(),
                    status: color_status(&v.status),
                    mountpoint: v.mountpoint.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

pub async fn delete_volume(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let volume: DockerVolume = client.delete(&format!("api/v1/volumes/{}", name)).await?;

    match format {
        OutputFormat::Json => print_json(&volume)?,
        OutputFormat::Table => print_success(&format!("Removed volume {}", volume.name)),
    }
    Ok(())
}
