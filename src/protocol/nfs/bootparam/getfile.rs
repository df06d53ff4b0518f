use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::bootparam::{bp_address, bp_getfile_arg, bp_getfile_res};
use crate::protocol::xdr::{deserialize, Serialize};

/// Handles BOOTPARAMPROC_GETFILE: where the client finds `file_id`.
pub fn bootparamproc_getfile(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<bp_getfile_arg>(input)?;
    debug!("bootparamproc_getfile({:?},{:?}) ", xid, args);
    let params = &context.state.bootparams;
    let response = bp_getfile_res {
        server_name: params.server_name.clone(),
        server_address: bp_address(params.server_address),
        server_path: params.file_path(&args.file_id).to_string(),
    };
    debug!("{:?} --> {:?}", xid, response);
    response.serialize(output)?;
    Ok(())
}
