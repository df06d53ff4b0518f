use std::io::{Read, Write};

use tracing::{debug, info};

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::bootparam::{bp_address, bp_whoami_arg, bp_whoami_res};
use crate::protocol::xdr::{deserialize, Serialize};

/// Handles BOOTPARAMPROC_WHOAMI
///
/// Whatever address the client reports, it is told the configured host and
/// domain name. The server address doubles as the router.
pub fn bootparamproc_whoami(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<bp_whoami_arg>(input)?;
    debug!("bootparamproc_whoami({:?},{:?}) ", xid, args);
    let params = &context.state.bootparams;
    info!("boot client {} is {}", args.client_address.0, params.client_name);
    let response = bp_whoami_res {
        client_name: params.client_name.clone(),
        domain_name: params.domain_name.clone(),
        router_address: bp_address(params.server_address),
    };
    response.serialize(output)?;
    Ok(())
}
