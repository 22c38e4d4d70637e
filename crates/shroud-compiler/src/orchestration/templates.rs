//! Text templates for orchestration fragments
//!
//! [`TemplateProvider`] has one method per [`Fragment`] construct and a provided
//! [`render`](TemplateProvider::render) dispatch. [`JavaScriptTemplates`] targets a web3 runtime
//! with a zokrates prover and a timber-style commitment tree.

use super::ir::{
    CommitmentCalc, Fragment, KeySetup, NullifierCalc, OwnerResolution, PreimageInit, PreimageRead,
    PreimageWrite, SignatureClose, SignatureOpen, StorageId, StorePath, TransactionCall, Witness,
    WitnessMode,
};
use super::proof_inputs::{InputBlock, ProofInput, StateInputs};
use super::transaction::TransactionArgument;
use super::GenerationStage;
use serde::{Deserialize, Serialize};
use shroud_runtime::{MappingKey, Operand, UpdateKind};

/// Locations baked into the generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Preimage database read and written by the routine
    pub db_path: String,
    pub key_db_path: String,
    /// Directory holding the shared runtime helpers
    pub common_dir: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            db_path: "/app/orchestration/common/db/preimage.json".to_string(),
            key_db_path: "/app/orchestration/common/db/key.json".to_string(),
            common_dir: "./common".to_string(),
        }
    }
}

pub trait TemplateProvider {
    fn heading(&self, stage: GenerationStage) -> String;
    fn imports(&self) -> String;
    fn contract_instance(&self, contract: &str) -> String;
    fn sender_binding(&self) -> String;
    fn parameter_binding(&self, name: &str) -> String;
    fn new_owner_key(&self, state: &str) -> String;
    fn signature_open(&self, signature: &SignatureOpen) -> String;
    fn signature_close(&self, signature: &SignatureClose) -> String;
    fn initialise_preimage(&self, init: &PreimageInit) -> String;
    fn initialise_keys(&self, keys: &KeySetup) -> String;
    fn read_preimage(&self, read: &PreimageRead) -> String;
    fn accessed_binding(&self, state: &str) -> String;
    fn load_store(&self) -> String;
    fn lazy_init(&self, path: &StorePath) -> String;
    fn write_preimage(&self, write: &PreimageWrite) -> String;
    fn persist_store(&self) -> String;
    fn membership_witness(&self, witness: &Witness) -> String;
    fn nullifier(&self, calc: &NullifierCalc) -> String;
    fn commitment(&self, calc: &CommitmentCalc) -> String;
    fn proof_inputs(&self, inputs: &[ProofInput]) -> String;
    fn generate_proof(&self, circuit: &str) -> String;
    fn flatten_proof(&self) -> String;
    fn send_transaction(&self, call: &TransactionCall) -> String;

    fn render(&self, fragment: &Fragment) -> String {
        match fragment {
            Fragment::Heading(stage) => self.heading(*stage),
            Fragment::Imports => self.imports(),
            Fragment::ContractInstance { contract } => self.contract_instance(contract),
            Fragment::SenderBinding => self.sender_binding(),
            Fragment::ParameterBinding { name } => self.parameter_binding(name),
            Fragment::NewOwnerKey { state } => self.new_owner_key(state),
            Fragment::SignatureOpen(signature) => self.signature_open(signature),
            Fragment::SignatureClose(signature) => self.signature_close(signature),
            Fragment::InitialisePreimage(init) => self.initialise_preimage(init),
            Fragment::InitialiseKeys(keys) => self.initialise_keys(keys),
            Fragment::ReadPreimage(read) => self.read_preimage(read),
            Fragment::AccessedBinding { state } => self.accessed_binding(state),
            Fragment::LoadStore => self.load_store(),
            Fragment::LazyInit(path) => self.lazy_init(path),
            Fragment::WritePreimage(write) => self.write_preimage(write),
            Fragment::PersistStore => self.persist_store(),
            Fragment::MembershipWitness(witness) => self.membership_witness(witness),
            Fragment::Nullifier(calc) => self.nullifier(calc),
            Fragment::Commitment(calc) => self.commitment(calc),
            Fragment::ProofInputs(inputs) => self.proof_inputs(inputs),
            Fragment::GenerateProof { circuit } => self.generate_proof(circuit),
            Fragment::FlattenProof => self.flatten_proof(),
            Fragment::SendTransaction(call) => self.send_transaction(call),
        }
    }
}

/// Renders fragments in order, dropping constructs that produce no text.
pub fn render_fragments<T: TemplateProvider + ?Sized>(templates: &T, fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|fragment| templates.render(fragment))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Default)]
pub struct JavaScriptTemplates {
    config: TemplateConfig,
}

impl JavaScriptTemplates {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }
}

fn store_access(root: &str, path: &StorePath) -> String {
    match &path.keyed_by {
        Some(state) => format!("{}.{}[{}_stateVarId_key.integer]", root, path.root, state),
        None => format!("{}.{}", root, path.root),
    }
}

fn optional_store_access(root: &str, path: &StorePath) -> String {
    match &path.keyed_by {
        Some(state) => format!("{}.{}?.[{}_stateVarId_key.integer]", root, path.root, state),
        None => format!("{}.{}", root, path.root),
    }
}

fn storage_id_lines(id: &StorageId) -> Vec<String> {
    match id {
        StorageId::Fixed { state, slot_id } => {
            vec![format!("const {}_stateVarId = generalise({}).hex(32);", state, slot_id)]
        }
        StorageId::Mapped { state, slot_id, key } => {
            let key_line = match key {
                MappingKey::Sender => format!(
                    "const {}_stateVarId_key = generalise(config.web3.options.defaultAccount); // emulates msg.sender",
                    state
                ),
                MappingKey::Parameter(name) | MappingKey::Accessed(name) => {
                    format!("const {}_stateVarId_key = {};", state, name)
                }
            };
            vec![
                format!("let {}_stateVarId = {};", state, slot_id),
                key_line,
                format!(
                    "{s}_stateVarId = generalise(utils.mimcHash([generalise({s}_stateVarId).bigInt, {s}_stateVarId_key.bigInt], 'ALT_BN_254')).hex(32);",
                    s = state
                ),
            ]
        }
    }
}

fn operand_sum(operands: &[Operand]) -> String {
    operands
        .iter()
        .map(|operand| match operand {
            Operand::Identifier(name) => format!("parseInt({}.integer, 10)", name),
            Operand::Literal(value) => value.clone(),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn owner_statement(state: &str, owner: &OwnerResolution) -> String {
    match owner {
        OwnerResolution::CallerOrSelf => format!(
            "{s}_newOwnerPublicKey = _{s}_newOwnerPublicKey === 0 ? publicKey : {s}_newOwnerPublicKey;",
            s = state
        ),
        OwnerResolution::SelfKey => format!("{}_newOwnerPublicKey = publicKey;", state),
        OwnerResolution::RegistryByKey { key } => format!(
            "{}_newOwnerPublicKey = generalise(await instance.methods.zkpPublicKeys({}.hex(20)).call()); // address should be registered",
            state, key
        ),
        OwnerResolution::RegistryByValue => [
            format!("{s}_newOwnerPublicKey = await instance.methods.zkpPublicKeys({s}.hex(20)).call();", s = state),
            format!("if ({}_newOwnerPublicKey === 0) {{", state),
            "\tconsole.log('WARNING: Public key for given eth address not found - reverting to your public key');"
                .to_string(),
            format!("\t{}_newOwnerPublicKey = publicKey;", state),
            "}".to_string(),
            format!("{s}_newOwnerPublicKey = generalise({s}_newOwnerPublicKey);", s = state),
        ]
        .join("\n"),
        OwnerResolution::RegistryByIdentifier { identifier } => format!(
            "{s}_newOwnerPublicKey = _{s}_newOwnerPublicKey === 0 ? generalise(await instance.methods.zkpPublicKeys(await instance.methods.{id}().call()).call()) : {s}_newOwnerPublicKey;",
            s = state,
            id = identifier
        ),
        OwnerResolution::Parameter { name } => format!(
            "{s}_newOwnerPublicKey = _{s}_newOwnerPublicKey === 0 ? {p} : {s}_newOwnerPublicKey;",
            s = state,
            p = name
        ),
    }
}

fn integers(names: &[String]) -> String {
    names.iter().map(|name| format!("{}.integer", name)).collect::<Vec<_>>().join(", ")
}

fn state_input_lines(inputs: &StateInputs) -> Vec<String> {
    let s = &inputs.state;
    let root = inputs.root_required.then(|| format!("{}_root.integer", s));
    let mut lines = Vec::new();

    match inputs.block {
        InputBlock::Whole { reinitialised_only: true, .. } => {}
        InputBlock::Whole { accessed_only: true, .. } => {
            lines.push("secretKey.integer".to_string());
            lines.push(format!("{}_nullifier.integer", s));
            lines.push(format!("{}_prev.integer", s));
            lines.push(format!("{}_prevSalt.integer", s));
            lines.extend(root);
            lines.push(format!("{}_index.integer", s));
            lines.push(format!("{}_path.integer", s));
            return lines;
        }
        InputBlock::Whole { .. } => {
            lines.push(format!("{}_commitmentExists ? secretKey.integer : generalise(0).integer", s));
            lines.push(format!("{}_nullifier.integer", s));
            lines.push(format!("{}_prev.integer", s));
            lines.push(format!("{}_prevSalt.integer", s));
            lines.push(format!("{}_commitmentExists ? 0 : 1", s));
            lines.extend(root);
            lines.push(format!("{}_index.integer", s));
            lines.push(format!("{}_path.integer", s));
        }
        InputBlock::Increment => {}
        InputBlock::Decrement => {
            lines.push("secretKey.integer".to_string());
            lines.push("secretKey.integer".to_string());
            for index in 0..2 {
                lines.push(format!("{}_{}_nullifier.integer", s, index));
            }
            for index in 0..2 {
                lines.push(format!("{}_{}_prev.integer", s, index));
                lines.push(format!("{}_{}_prevSalt.integer", s, index));
            }
            lines.extend(root);
            for index in 0..2 {
                lines.push(format!("{}_{}_index.integer", s, index));
                lines.push(format!("{}_{}_path.integer", s, index));
            }
            lines.push(format!("{}_newOwnerPublicKey.integer", s));
            lines.push(format!("{}_2_newSalt.integer", s));
            lines.push(format!("{}_2_newCommitment.integer", s));
            return lines;
        }
    }

    if !matches!(inputs.block, InputBlock::Whole { burned_only: true, .. }) {
        lines.push(format!("{}_newOwnerPublicKey.integer", s));
        lines.push(format!("{}_newSalt.integer", s));
        lines.push(format!("{}_newCommitment.integer", s));
    }
    lines
}

impl TemplateProvider for JavaScriptTemplates {
    fn heading(&self, stage: GenerationStage) -> String {
        let text = match stage {
            GenerationStage::Imports => return String::new(),
            GenerationStage::FunctionDefinition => "Initialisation of variables:",
            GenerationStage::InitialisePreimage => "Initialise commitment preimages:",
            GenerationStage::InitialiseKeys => "Read dbs for keys and previous commitment values:",
            GenerationStage::ReadPreimage => "Read commitment preimages and resolve new owners:",
            GenerationStage::WritePreimage => "Write new commitment preimage to db:",
            GenerationStage::MembershipWitness => "Extract set membership witness:",
            GenerationStage::CalculateNullifier => "Calculate nullifier(s):",
            GenerationStage::CalculateCommitment => "Calculate commitment(s):",
            GenerationStage::GenerateProof => "Call Zokrates to generate the proof:",
            GenerationStage::SendTransaction => "Send transaction to the blockchain:",
        };
        format!("\n// {}", text)
    }

    fn imports(&self) -> String {
        let common = &self.config.common_dir;
        [
            "import config from 'config';".to_string(),
            "import utils from 'zkp-utils';".to_string(),
            "import GN from 'general-number';".to_string(),
            "import fs from 'fs';".to_string(),
            String::new(),
            format!("import {{ getContractInstance, registerKey }} from '{}/contract.mjs';", common),
            format!("import {{ generateProof }} from '{}/zokrates.mjs';", common),
            format!("import {{ getInputCommitments }} from '{}/commitment-storage.mjs';", common),
            format!("import {{ getMembershipWitness, getRoot }} from '{}/timber.mjs';", common),
            format!("import poseidonHash from '{}/poseidon.mjs';", common),
            String::new(),
            "const { generalise } = GN;".to_string(),
            format!("const db = '{}';", self.config.db_path),
            format!("const keyDb = '{}';", self.config.key_db_path),
        ]
        .join("\n")
    }

    fn contract_instance(&self, contract: &str) -> String {
        format!("const instance = await getContractInstance('{}');", contract)
    }

    fn sender_binding(&self) -> String {
        "const msgSender = generalise(config.web3.options.defaultAccount);".to_string()
    }

    fn parameter_binding(&self, name: &str) -> String {
        format!("const {n} = generalise(_{n});", n = name)
    }

    fn new_owner_key(&self, state: &str) -> String {
        format!("let {s}_newOwnerPublicKey = generalise(_{s}_newOwnerPublicKey);", s = state)
    }

    fn signature_open(&self, signature: &SignatureOpen) -> String {
        let arguments: Vec<String> = signature
            .parameters
            .iter()
            .map(|name| format!("_{}", name))
            .chain(signature.overrides.iter().map(|name| format!("{} = 0", name)))
            .collect();
        format!("\nexport default async function {}({}) {{", signature.function, arguments.join(", "))
    }

    fn signature_close(&self, signature: &SignatureClose) -> String {
        let returns: String =
            signature.returns.iter().map(|name| format!(", {n}: {n}.integer", n = name)).collect();
        format!("\nreturn {{ tx{} }};\n}}", returns)
    }

    fn initialise_preimage(&self, init: &PreimageInit) -> String {
        let s = &init.state;
        let mut lines = vec![format!("\n// Initialise commitment preimage of {}:", s)];
        lines.extend(storage_id_lines(&init.storage_id));

        if init.kind != UpdateKind::Whole {
            return lines.join("\n");
        }

        lines.push(format!(
            "const {}_store = fs.existsSync(db) ? JSON.parse(fs.readFileSync(db, 'utf-8')) : {{}};",
            s
        ));
        lines.push(format!(
            "const {}_stored = {};",
            s,
            optional_store_access(&format!("{}_store", s), &init.path)
        ));

        if init.accessed_only {
            lines.push(format!(
                "if (!{s}_stored) throw new Error('No commitment found for accessed state {s}');",
                s = s
            ));
            lines.push(format!("const {s}_preimage = {s}_stored;", s = s));
        } else {
            lines.push(format!("let {}_commitmentExists = true;", s));
            lines.push(format!("let {}_witnessRequired = true;", s));
            lines.push(format!("let {}_preimage = {{ value: 0, salt: 0, commitment: 0 }};", s));
            lines.push(format!("if (!{}_stored) {{", s));
            lines.push(format!("\t{}_commitmentExists = false;", s));
            lines.push(format!("\t{}_witnessRequired = false;", s));
            lines.push("} else {".to_string());
            lines.push(format!("\t{s}_preimage = {s}_stored;", s = s));
            lines.push("}".to_string());
        }
        lines.join("\n")
    }

    fn initialise_keys(&self, keys: &KeySetup) -> String {
        [
            format!(
                "if (!fs.existsSync(keyDb)) await registerKey(utils.randomHex(31), '{}', {});",
                keys.contract, keys.registry
            ),
            "const keys = JSON.parse(fs.readFileSync(keyDb, 'utf-8'));".to_string(),
            "const secretKey = generalise(keys.secretKey);".to_string(),
            "const publicKey = generalise(keys.publicKey);".to_string(),
        ]
        .join("\n")
    }

    fn read_preimage(&self, read: &PreimageRead) -> String {
        let s = &read.state;
        let mut lines = Vec::new();
        if let Some(owner) = &read.owner {
            lines.push(owner_statement(s, owner));
        }

        match read.kind {
            UpdateKind::Whole => {
                if read.accessed_only || read.initialised {
                    lines.push(format!("const {s}_currentCommitment = generalise({s}_preimage.commitment);", s = s));
                } else {
                    lines.push(format!(
                        "const {s}_currentCommitment = {s}_commitmentExists ? generalise({s}_preimage.commitment) : generalise(0);",
                        s = s
                    ));
                }
                if !read.reinitialised_only {
                    lines.push(format!("const {s}_prev = generalise({s}_preimage.value);", s = s));
                    lines.push(format!("const {s}_prevSalt = generalise({s}_preimage.salt);", s = s));
                }
            }
            UpdateKind::Increment => {
                lines.push(format!(
                    "const {}_newCommitmentValue = generalise({});",
                    s,
                    operand_sum(&read.operands)
                ));
            }
            UpdateKind::Decrement => {
                for index in 0..2 {
                    lines.push(format!(
                        "const {s}_{i}_oldCommitment = _{s}_{i}_oldCommitment === 0 ? null : generalise(_{s}_{i}_oldCommitment).hex(32);",
                        s = s,
                        i = index
                    ));
                }
                lines.push(format!("const {}_amount = generalise({});", s, operand_sum(&read.operands)));
                lines.push(format!(
                    "const {s}_inputs = await getInputCommitments(publicKey.hex(32), {s}_amount.integer, {s}_stateVarId, [{s}_0_oldCommitment, {s}_1_oldCommitment]);",
                    s = s
                ));
                lines.push(format!(
                    "if (!{s}_inputs) throw new Error('Not enough commitments to decrement {s}');",
                    s = s
                ));
                lines.push(format!("const [{s}_0_preimage, {s}_1_preimage] = {s}_inputs;", s = s));
                for index in 0..2 {
                    lines.push(format!(
                        "const {s}_{i}_currentCommitment = generalise({s}_{i}_preimage.commitment);",
                        s = s,
                        i = index
                    ));
                    lines.push(format!("const {s}_{i}_prev = generalise({s}_{i}_preimage.value);", s = s, i = index));
                    lines.push(format!(
                        "const {s}_{i}_prevSalt = generalise({s}_{i}_preimage.salt);",
                        s = s,
                        i = index
                    ));
                }
                lines.push(format!(
                    "const {s}_change = generalise(parseInt({s}_0_prev.integer, 10) + parseInt({s}_1_prev.integer, 10) - parseInt({s}_amount.integer, 10));",
                    s = s
                ));
            }
        }
        lines.join("\n")
    }

    fn accessed_binding(&self, state: &str) -> String {
        format!("const {s} = generalise({s}_preimage.value);", s = state)
    }

    fn load_store(&self) -> String {
        [
            "const persistPreimages = () => {",
            "let preimage = {};",
            "if (fs.existsSync(db)) {",
            "\tpreimage = JSON.parse(fs.readFileSync(db, 'utf-8'));",
            "}",
        ]
        .join("\n")
    }

    fn lazy_init(&self, path: &StorePath) -> String {
        let root = format!("preimage.{}", path.root);
        let mut lines = vec![format!("if (!{r}) {r} = {{}};", r = root)];
        if path.keyed_by.is_some() {
            lines.push(format!("if (!{e}) {e} = {{}};", e = store_access("preimage", path)));
        }
        lines.join("\n")
    }

    fn write_preimage(&self, write: &PreimageWrite) -> String {
        let s = &write.state;
        let entry = store_access("preimage", &write.path);
        match write.kind {
            UpdateKind::Whole if write.burned_only => format!("{} = {{}};", entry),
            UpdateKind::Whole => format!(
                "{e} = {{ value: {s}.integer, salt: {s}_newSalt.integer, publicKey: {s}_newOwnerPublicKey.integer, commitment: {s}_newCommitment.integer }};",
                e = entry,
                s = s
            ),
            UpdateKind::Increment => format!(
                "{e}[{s}_newCommitment.hex(32)] = {{ value: {s}_newCommitmentValue.integer, salt: {s}_newSalt.integer, publicKey: {s}_newOwnerPublicKey.integer }};",
                e = entry,
                s = s
            ),
            UpdateKind::Decrement => [
                format!("{e}[{s}_0_currentCommitment.hex(32)].isNullified = true;", e = entry, s = s),
                format!("{e}[{s}_1_currentCommitment.hex(32)].isNullified = true;", e = entry, s = s),
                format!(
                    "{e}[{s}_2_newCommitment.hex(32)] = {{ value: {s}_change.integer, salt: {s}_2_newSalt.integer, publicKey: {s}_newOwnerPublicKey.integer }};",
                    e = entry,
                    s = s
                ),
            ]
            .join("\n"),
        }
    }

    fn persist_store(&self) -> String {
        "fs.writeFileSync(db, JSON.stringify(preimage, null, 4));\n};".to_string()
    }

    fn membership_witness(&self, witness: &Witness) -> String {
        let s = &witness.state;
        let c = &witness.contract;
        match witness.mode {
            WitnessMode::Partitioned { decrement: false } => String::new(),
            WitnessMode::Partitioned { decrement: true } => {
                let mut lines = Vec::new();
                for index in 0..2 {
                    lines.push(format!(
                        "const {s}_witness_{i} = await getMembershipWitness('{c}', {s}_{i}_currentCommitment.integer);",
                        s = s,
                        i = index,
                        c = c
                    ));
                }
                lines.push(format!("const {s}_root = generalise({s}_witness_0.root);", s = s));
                for index in 0..2 {
                    lines.push(format!("const {s}_{i}_index = generalise({s}_witness_{i}.index);", s = s, i = index));
                    lines.push(format!("const {s}_{i}_path = generalise({s}_witness_{i}.path).all;", s = s, i = index));
                }
                lines.join("\n")
            }
            WitnessMode::Whole => [
                format!("const {}_emptyPath = new Array(32).fill(0);", s),
                format!(
                    "const {s}_witness = {s}_witnessRequired ? await getMembershipWitness('{c}', {s}_currentCommitment.integer) : {{ index: 0, path: {s}_emptyPath, root: (await getRoot('{c}')) || 0 }};",
                    s = s,
                    c = c
                ),
                format!("const {s}_index = generalise({s}_witness.index);", s = s),
                format!("const {s}_root = generalise({s}_witness.root);", s = s),
                format!("const {s}_path = generalise({s}_witness.path).all;", s = s),
            ]
            .join("\n"),
            WitnessMode::Accessed => [
                format!(
                    "const {s}_witness = await getMembershipWitness('{c}', {s}_currentCommitment.integer);",
                    s = s,
                    c = c
                ),
                format!("const {s}_index = generalise({s}_witness.index);", s = s),
                format!("const {s}_root = generalise({s}_witness.root);", s = s),
                format!("const {s}_path = generalise({s}_witness.path).all;", s = s),
            ]
            .join("\n"),
        }
    }

    fn nullifier(&self, calc: &NullifierCalc) -> String {
        let s = &calc.state;
        let hash = |salt: &str, key: &str| {
            format!(
                "poseidonHash([BigInt({}_stateVarId), BigInt({}.hex(32)), BigInt({}.hex(32))])",
                s, key, salt
            )
        };

        match calc.kind {
            UpdateKind::Decrement => (0..2)
                .flat_map(|index| {
                    let name = format!("{}_{}_nullifier", s, index);
                    [
                        format!("let {} = {};", name, hash(&format!("{}_{}_prevSalt", s, index), "secretKey")),
                        format!("{n} = generalise({n}.hex(32));", n = name),
                    ]
                })
                .collect::<Vec<_>>()
                .join("\n"),
            UpdateKind::Whole if calc.accessed_only => [
                format!("let {}_nullifier = {};", s, hash(&format!("{}_prevSalt", s), "secretKey")),
                format!("{s}_nullifier = generalise({s}_nullifier.hex(32));", s = s),
            ]
            .join("\n"),
            UpdateKind::Whole => [
                format!(
                    "let {s}_nullifier = {s}_commitmentExists ? {} : {};",
                    hash(&format!("{}_prevSalt", s), "secretKey"),
                    hash(&format!("{}_prevSalt", s), "generalise(0)"),
                    s = s
                ),
                format!("{s}_nullifier = generalise({s}_nullifier.hex(32));", s = s),
            ]
            .join("\n"),
            UpdateKind::Increment => String::new(),
        }
    }

    fn commitment(&self, calc: &CommitmentCalc) -> String {
        let s = &calc.state;
        let (prefix, value) = match calc.kind {
            UpdateKind::Whole => (s.clone(), s.clone()),
            UpdateKind::Increment => (s.clone(), format!("{}_newCommitmentValue", s)),
            UpdateKind::Decrement => (format!("{}_2", s), format!("{}_change", s)),
        };
        [
            format!("const {}_newSalt = generalise(utils.randomHex(31));", prefix),
            format!(
                "let {p}_newCommitment = poseidonHash([BigInt({s}_stateVarId), BigInt({v}.hex(32)), BigInt({s}_newOwnerPublicKey.hex(32)), BigInt({p}_newSalt.hex(32))]);",
                p = prefix,
                s = s,
                v = value
            ),
            format!("{p}_newCommitment = generalise({p}_newCommitment.hex(32));", p = prefix),
        ]
        .join("\n")
    }

    fn proof_inputs(&self, inputs: &[ProofInput]) -> String {
        let mut lines = vec!["const allInputs = [".to_string()];
        for input in inputs {
            match input {
                ProofInput::Scalar(name) => lines.push(format!("\t{}.integer,", name)),
                ProofInput::State(block) => {
                    lines.extend(state_input_lines(block).into_iter().map(|line| format!("\t{},", line)))
                }
            }
        }
        lines.push("].flat(Infinity);".to_string());
        lines.join("\n")
    }

    fn generate_proof(&self, circuit: &str) -> String {
        format!("const res = await generateProof('{}', allInputs);", circuit)
    }

    fn flatten_proof(&self) -> String {
        [
            "const proof = generalise(Object.values(res.proof).flat(Infinity))",
            "\t.map(coeff => coeff.integer)",
            "\t.flat(Infinity);",
        ]
        .join("\n")
    }

    fn send_transaction(&self, call: &TransactionCall) -> String {
        let arguments: Vec<String> = call
            .parameters
            .arguments(&call.public_inputs)
            .into_iter()
            .map(|argument| match argument {
                TransactionArgument::Scalar(name) => format!("{}.integer", name),
                TransactionArgument::Array(names) => format!("[{}]", integers(&names)),
                TransactionArgument::Proof => "proof".to_string(),
            })
            .collect();

        [
            "const tx = await instance.methods".to_string(),
            format!("\t.{}({})", call.function, arguments.join(", ")),
            "\t.send({".to_string(),
            "\t\tfrom: config.web3.options.defaultAccount,".to_string(),
            "\t\tgas: config.web3.options.defaultGas,".to_string(),
            "\t});".to_string(),
            String::new(),
            "persistPreimages();".to_string(),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::transaction::TransactionParameters;

    fn templates() -> JavaScriptTemplates {
        JavaScriptTemplates::default()
    }

    #[test]
    fn test_default_config() {
        let config = TemplateConfig::default();
        assert_eq!(config.db_path, "/app/orchestration/common/db/preimage.json");
        assert_eq!(config.common_dir, "./common");
    }

    #[test]
    fn test_imports_use_configured_paths() {
        let templates = JavaScriptTemplates::new(TemplateConfig {
            db_path: "/tmp/pre.json".to_string(),
            key_db_path: "/tmp/key.json".to_string(),
            common_dir: "../lib".to_string(),
        });
        let text = templates.imports();
        assert!(text.contains("const db = '/tmp/pre.json';"));
        assert!(text.contains("const keyDb = '/tmp/key.json';"));
        assert!(text.contains("from '../lib/timber.mjs'"));
    }

    #[test]
    fn test_mapped_storage_id() {
        let id = StorageId::Mapped {
            state: "bal_msg".to_string(),
            slot_id: 5,
            key: MappingKey::Sender,
        };
        let lines = storage_id_lines(&id);
        assert_eq!(lines[0], "let bal_msg_stateVarId = 5;");
        assert!(lines[1].contains("config.web3.options.defaultAccount"));
        assert!(lines[2].contains("utils.mimcHash"));
    }

    #[test]
    fn test_owner_fallback_warning() {
        let text = owner_statement("owner", &OwnerResolution::RegistryByValue);
        assert!(text.contains("WARNING: Public key for given eth address not found"));
        assert!(text.contains("owner_newOwnerPublicKey = publicKey;"));
    }

    #[test]
    fn test_operand_sum() {
        let operands = vec![Operand::Identifier("amount".to_string()), Operand::Literal("2".to_string())];
        assert_eq!(operand_sum(&operands), "parseInt(amount.integer, 10) + 2");
    }

    #[test]
    fn test_increment_witness_is_empty() {
        let witness = Witness {
            state: "t".to_string(),
            contract: "C".to_string(),
            mode: WitnessMode::Partitioned { decrement: false },
        };
        assert!(templates().membership_witness(&witness).is_empty());
        assert_eq!(render_fragments(&templates(), &[Fragment::MembershipWitness(witness)]), "");
    }

    #[test]
    fn test_whole_block_root_and_burn() {
        let block = StateInputs {
            state: "b".to_string(),
            block: InputBlock::Whole { reinitialised_only: false, burned_only: true, accessed_only: false },
            root_required: true,
        };
        let lines = state_input_lines(&block);
        assert!(lines.contains(&"b_commitmentExists ? 0 : 1".to_string()));
        assert!(lines.contains(&"b_root.integer".to_string()));
        assert!(!lines.iter().any(|line| line.contains("newCommitment")));
    }

    #[test]
    fn test_send_transaction_arguments() {
        let call = TransactionCall {
            function: "deposit".to_string(),
            public_inputs: vec![],
            parameters: TransactionParameters {
                roots: vec!["balance_root".to_string()],
                nullifiers: vec!["balance_nullifier".to_string()],
                commitments: vec!["balance_newCommitment".to_string()],
                accessed_nullifiers: vec![],
            },
        };
        let text = templates().send_transaction(&call);
        assert!(text.contains(
            ".deposit([balance_nullifier.integer], balance_root.integer, [balance_newCommitment.integer], proof)"
        ));
    }
}
