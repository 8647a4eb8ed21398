use std::path::PathBuf;

use tracing::{info, span, Level};

use cloudstore::{ClientConfig, CloudStorage, FileRequest, StorageClient};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().json().init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let matches = clap::Command::new("cloudstore")
        .arg(
            clap::Arg::new("PROVIDER")
                .long("provider")
                .default_value("gcs"),
        )
        .arg(clap::Arg::new("CREDS").long("creds"))
        .subcommand_required(true)
        .subcommand(
            clap::Command::new("upload")
                .arg(clap::Arg::new("BUCKET").required(true).index(1))
                .arg(clap::Arg::new("FILE").required(true).index(2))
                .arg(clap::Arg::new("LOCAL").required(true).index(3))
                .arg(clap::Arg::new("PATH").long("path").default_value("")),
        )
        .subcommand(
            clap::Command::new("download")
                .arg(clap::Arg::new("BUCKET").required(true).index(1))
                .arg(clap::Arg::new("FILE").required(true).index(2))
                .arg(clap::Arg::new("LOCAL").required(true).index(3))
                .arg(clap::Arg::new("PATH").long("path").default_value("")),
        )
        .subcommand(
            clap::Command::new("read")
                .arg(clap::Arg::new("BUCKET").required(true).index(1))
                .arg(clap::Arg::new("FILE").required(true).index(2))
                .arg(clap::Arg::new("OFFSET").required(true).index(3))
                .arg(clap::Arg::new("LEN").required(true).index(4))
                .arg(clap::Arg::new("PATH").long("path").default_value("")),
        )
        .subcommand(clap::Command::new("list").arg(clap::Arg::new("BUCKET").required(true).index(1)))
        .subcommand(
            clap::Command::new("delete")
                .arg(clap::Arg::new("BUCKET").required(true).index(1))
                .arg(clap::Arg::new("PATH").required(true).index(2))
                .arg(clap::Arg::new("FILE").required(true).index(3)),
        )
        .subcommand(
            clap::Command::new("delete-all")
                .arg(clap::Arg::new("BUCKET").required(true).index(1)),
        )
        .get_matches();

    let config = ClientConfig {
        credentials: matches.get_one::<String>("CREDS").map(PathBuf::from),
    };

    let client = match matches.get_one::<String>("PROVIDER").unwrap().as_str() {
        "s3" => StorageClient::connect_s3(config).await,
        _ => StorageClient::connect_gcs(config).await,
    }
    .unwrap();

    match matches.subcommand() {
        Some(("upload", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();
            let file = sub.get_one::<String>("FILE").unwrap();
            let path = sub.get_one::<String>("PATH").unwrap();
            let local = sub.get_one::<String>("LOCAL").unwrap();

            let req = FileRequest::new(bucket, file, path, 0).unwrap();
            let mut src = tokio::fs::File::open(local).await.unwrap();

            let written = client.upload_file(&mut src, &req).await.unwrap();
            info!(bucket = %bucket, key = %req.object_key(), bytes = written, "uploaded");
        }
        Some(("download", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();
            let file = sub.get_one::<String>("FILE").unwrap();
            let path = sub.get_one::<String>("PATH").unwrap();
            let local = sub.get_one::<String>("LOCAL").unwrap();

            let req = FileRequest::new(bucket, file, path, 0).unwrap();
            let mut dst = tokio::fs::File::create(local).await.unwrap();

            let read = client.download_file(&mut dst, &req).await.unwrap();
            info!(bucket = %bucket, key = %req.object_key(), bytes = read, "downloaded");
        }
        Some(("read", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();
            let file = sub.get_one::<String>("FILE").unwrap();
            let path = sub.get_one::<String>("PATH").unwrap();
            let offset: u64 = sub.get_one::<String>("OFFSET").unwrap().parse().unwrap();
            let len: usize = sub.get_one::<String>("LEN").unwrap().parse().unwrap();

            let req = FileRequest::new(bucket, file, path, 0).unwrap();
            let mut buf = vec![0u8; len];

            let n = client.read_at(&req, &mut buf, offset).await.unwrap();
            info!(
                bucket = %bucket,
                key = %req.object_key(),
                bytes = n,
                data = %String::from_utf8_lossy(&buf[..n]),
                "read chunk"
            );
        }
        Some(("list", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();

            let req = FileRequest::new(bucket, "", "", 0).unwrap();
            let names = client.list_objects(&req).await.unwrap();

            for name in names {
                info!(bucket = %bucket, key = %name, "object");
            }
        }
        Some(("delete", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();
            let path = sub.get_one::<String>("PATH").unwrap();
            let file = sub.get_one::<String>("FILE").unwrap();

            let req = FileRequest::new(bucket, file, path, 0).unwrap();
            client.delete_object(&req).await.unwrap();
            info!(bucket = %bucket, path = %path, file = %file, "deleted");
        }
        Some(("delete-all", sub)) => {
            let bucket = sub.get_one::<String>("BUCKET").unwrap();

            let req = FileRequest::new(bucket, "", "", 0).unwrap();
            client.delete_objects(&req).await.unwrap();
            info!(bucket = %bucket, "deleted all objects");
        }
        _ => unreachable!(),
    }

    client.close().await.unwrap();
}
