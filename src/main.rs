// ID card extraction service
// `serve` runs the HTTP endpoint, `extract` runs the same pipeline on a local file.

use clap::Parser;
use idcard::{
    api,
    config::{Cli, Command},
    models::UploadedImage,
    processing::decode_base64_image,
    IdCardError,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), IdCardError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let processor = cli.engine.build_processor()?;

    match cli.command {
        Command::Serve {
            bind,
            max_upload_bytes,
        } => {
            let router = api::create_router(processor, max_upload_bytes);
            api::serve(bind, router).await
        }
        Command::Extract { path, save_face } => {
            let bytes = tokio::fs::read(&path).await?;
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            let upload = UploadedImage::new(bytes, None, file_name)?;

            let result = processor.process(upload).await?;
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| IdCardError::EncodingError(e.to_string()))?;
            println!("{}", json);

            if let Some(target) = save_face {
                save_face_image(&result.image_base64, &target)?;
            }
            Ok(())
        }
    }
}

fn save_face_image(encoded: &str, target: &Path) -> Result<(), IdCardError> {
    match decode_base64_image(encoded) {
        Ok(face) => {
            face.save(target)
                .map_err(|e| IdCardError::EncodingError(format!("Failed to save {:?}: {}", target, e)))?;
            log::info!("Face image written to {:?}", target);
        }
        Err(_) => log::warn!("No face image to save: {}", encoded),
    }
    Ok(())
}
