//! One module per SMMUv3 register named in §6 of the specification.
//! Every register is expressed as a `tock_registers::register_bitfields!`
//! block with named bit ranges, following the layout
//! `bullhh-smmuv3::regs` already established for `IDR0`/`IDR1`/`CR0`/etc.

mod aidr;
mod cmdq_base;
mod cmdq_cons;
mod cmdq_prod;
mod cr0;
mod cr0ack;
mod cr1;
mod cr2;
mod eventq_base;
mod eventq_cons;
mod eventq_prod;
mod gbpa;
mod gerror;
mod gerrorn;
mod idr0;
mod idr1;
mod idr5;
mod irq_ctrl;
mod irq_ctrlack;
mod strtab_base;
mod strtab_base_cfg;

pub use aidr::{AIDRReg, AIDR};
pub use cmdq_base::{CmdQBaseReg, CMDQ_BASE};
pub use cmdq_cons::{CmdQConsReg, CMDQ_CONS};
pub use cmdq_prod::{CmdQProdReg, CMDQ_PROD};
pub use cr0::{Cr0Reg, CR0};
pub use cr0ack::{Cr0AckReg, CR0ACK};
pub use cr1::{Cr1Reg, CR1};
pub use cr2::{Cr2Reg, CR2};
pub use eventq_base::{EventQBaseReg, EVENTQ_BASE};
pub use eventq_cons::{EventQConsReg, EVENTQ_CONS};
pub use eventq_prod::{EventQProdReg, EVENTQ_PROD};
pub use gbpa::{GbpaReg, GBPA};
pub use gerror::{GerrorReg, GERROR};
pub use gerrorn::{GerrorNReg, GERRORN};
pub use idr0::{IDR0Reg, IDR0};
pub use idr1::{IDR1Reg, IDR1};
pub use idr5::{IDR5Reg, IDR5};
pub use irq_ctrl::{IrqCtrlReg, IRQ_CTRL};
pub use irq_ctrlack::{IrqCtrlAckReg, IRQ_CTRLACK};
pub use strtab_base::{StrtabBaseReg, STRTAB_BASE};
pub use strtab_base_cfg::{StrtabBaseCfgReg, STRTAB_BASE_CFG};
