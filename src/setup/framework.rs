//! Setup for [poise::Framework]

use crate::commands;
use crate::serenity;
use crate::Config;
use crate::Data;
use crate::PhonographError;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, PhonographError>;

/// Construct a [poise::Framework]
pub(super) fn framework(config: Config) -> Framework {
    poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config))
        .build()
}

/// Configure options for the [Framework]
fn framework_options() -> poise::FrameworkOptions<Data, PhonographError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: crate::commands::list(),
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    config: Config,
) -> poise::BoxFuture<'a, Result<Data, PhonographError>> {
    Box::pin(async move {
        register_commands(ctx, config.dev_guild()).await?;

        tracing::info!(
            "Logged in as {name}, in {guilds} guilds.",
            name = rdy.user.name,
            guilds = rdy.guilds.len(),
        );

        let notify_list = config.notify_list(fw);
        Ok(Data::new(notify_list, config.player().clone()))
    })
}

/// Register every command globally, and on `dev_guild` where they show up
/// immediately.
async fn register_commands(
    ctx: &serenity::Context,
    dev_guild: Option<serenity::GuildId>,
) -> Result<(), PhonographError> {
    let app_commands = poise::builtins::create_application_commands(&commands::list());
    tracing::debug!("Registering {} commands.", app_commands.len());

    serenity::Command::set_global_commands(ctx, app_commands.clone()).await?;
    if let Some(guild) = dev_guild {
        tracing::info!("Registering commands on dev guild {guild}.");
        guild.set_commands(ctx, app_commands).await?;
    }
    Ok(())
}
