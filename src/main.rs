//! Groundtrack - Satellite Ground-Track Viewer
//!
//! Desktop viewer for a satellite's ground track over a rotating globe.

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use clap::{CommandFactory, Parser};

use groundtrack::CorePlugin;
use groundtrack::backend::{Backend, HttpBackend};
use groundtrack::camera::CameraPlugin;
use groundtrack::config::{Cli, ViewerConfig};
use groundtrack::input::InputPlugin;
use groundtrack::picker::PointerPickPlugin;
use groundtrack::render::RenderPlugin;
use groundtrack::ui::UiPlugin;

fn main() {
    let config = ViewerConfig::from(Cli::parse());
    let backend = match HttpBackend::new(&config.backend_url, config.request_timeout) {
        Ok(http) => Backend::new(http),
        Err(err) => Cli::command()
            .error(clap::error::ErrorKind::ValueValidation, err)
            .exit(),
    };

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Groundtrack".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        // Insert resources before plugins that read them at build time
        .insert_resource(config)
        .insert_resource(backend)
        .add_plugins(CorePlugin)
        .add_plugins((
            CameraPlugin,
            RenderPlugin,
            InputPlugin,
            PointerPickPlugin,
            UiPlugin,
        ))
        .run();
}
