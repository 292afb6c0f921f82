use anyhow::Result;
use remex_core::{
    action_decode, action_encode, exec_action, object_get, object_put, Config, ExecutionOutcome,
    ObjectPutRequest,
};

use crate::cli::{ActionCommand, CommandGroupCli, ObjectCommand};

pub fn run(config: &Config, command: &CommandGroupCli) -> Result<ExecutionOutcome> {
    match command {
        CommandGroupCli::Action(ActionCommand::Encode(args)) => {
            action_encode(&args.input, &args.output)
        }
        CommandGroupCli::Action(ActionCommand::Decode(args)) => action_decode(&args.input),
        CommandGroupCli::Object(ObjectCommand::Put(args)) => {
            let request = ObjectPutRequest {
                id: args.id,
                value: args.value.clone(),
                readers: args.readers.clone(),
                tags: args.tags.clone(),
                description: args.description.clone(),
            };
            object_put(config, &request)
        }
        CommandGroupCli::Object(ObjectCommand::Get(args)) => object_get(config, args.id),
        CommandGroupCli::Exec(args) => exec_action(config, &args.input, &args.requester),
    }
}
