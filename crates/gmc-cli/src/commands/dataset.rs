//! `gmc dataset` command implementation

use colored::Colorize;
use gmc_server::features::datasets::{
    commands::{create_children, update_status},
    queries::parent,
    CreateChildDatasetsCommand, UpdateDatasetStatusCommand,
};
use tracing::info;

use super::Context;
use crate::error::Result;
use crate::output::print_json;
use crate::DatasetCommand;

pub async fn run(ctx: &Context, command: DatasetCommand) -> Result<()> {
    match command {
        DatasetCommand::Status {
            dataset_uuid,
            status,
        } => {
            info!(%dataset_uuid, %status, "Updating dataset status");
            let response = update_status::handle(
                ctx.pool.clone(),
                UpdateDatasetStatusCommand {
                    dataset_uuid,
                    status,
                },
            )
            .await?;

            print_json(&response)?;
            eprintln!(
                "{} {} is {} ({} descendants moved)",
                "✓".green(),
                dataset_uuid,
                response.status.to_string().bold(),
                response.propagated.len()
            );
        },

        DatasetCommand::Children {
            dataset_uuid,
            topic,
        } => {
            let response = create_children::handle(
                ctx.pool.clone(),
                CreateChildDatasetsCommand {
                    parent_uuid: dataset_uuid,
                    topic,
                },
            )
            .await?;

            print_json(&response)?;
            eprintln!("{} {} child datasets created", "✓".green(), response.created.len());
        },

        DatasetCommand::Parent { dataset_uuid } => {
            match parent::handle(ctx.pool.clone(), dataset_uuid).await? {
                Some(found) => print_json(&found)?,
                None => eprintln!("{} has no parent dataset", dataset_uuid),
            }
        },
    }

    Ok(())
}
