use std::convert::TryFrom;
use std::fs::File;
use std::io::Write;
use std::process::exit;
use clap::Parser;
use log::{error, info, warn};
use serde_json::json;
use spvref::{AccessType, DescriptorType, EntryPoint, InterfaceVariable,
    ReflectConfig, Reflection, SpirvBinary, TypeDesc, TypeIdx};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reflect SPIR-V binaries into JSON.", long_about = None)]
struct Args {
    #[arg(required = true, help = "Input SPIR-V binary paths.")]
    paths: Vec<String>,

    #[arg(
        short,
        long,
        help = "Output JSON file path. The output is printed to stdout if this \
        path is not given."
    )]
    out_path: Option<String>,

    #[arg(
        long,
        help = "Reference all resources even if they are never used by the \
        entry points."
    )]
    ref_all: bool,

    #[arg(
        long,
        help = "Combine separate sampled images and samplers that are only \
        ever used together."
    )]
    combine: bool,

    #[arg(
        long,
        help = "Generate unique names for resource variables, struct types \
        and interface variables without debug names."
    )]
    unique_names: bool,

    #[arg(
        long,
        value_name = "ID=U32",
        value_parser = parse_spec,
        help = "Override the specialization constant with `SpecId` ID by a \
        32-bit unsigned integer."
    )]
    spec: Vec<(u32, u32)>,
}

fn parse_spec(s: &str) -> Result<(u32, u32), String> {
    let pos = s.find('=')
        .ok_or_else(|| format!("no `=` found in '{}'", s))?;
    let spec_id = s[..pos].parse::<u32>().map_err(|e| e.to_string())?;
    let value = s[pos + 1..].parse::<u32>().map_err(|e| e.to_string())?;
    Ok((spec_id, value))
}

fn load_spirv(path: &str) -> Option<SpirvBinary> {
    let buf = match std::fs::read(path) {
        Ok(x) => x,
        Err(e) => {
            error!("cannot read '{}': {}", path, e);
            return None;
        },
    };
    match SpirvBinary::try_from(buf) {
        Ok(spv) => Some(spv),
        Err(e) => {
            error!("'{}' is not spirv: {}", path, e);
            None
        },
    }
}

fn access2str(access: AccessType) -> &'static str {
    match access {
        AccessType::ReadOnly => "ReadOnly",
        AccessType::WriteOnly => "WriteOnly",
        AccessType::ReadWrite => "ReadWrite",
    }
}
fn desc_ty2json(desc_ty: DescriptorType) -> serde_json::Value {
    match desc_ty {
        DescriptorType::StorageImage(x) => json!(format!("StorageImage({})", access2str(x))),
        DescriptorType::StorageTexelBuffer(x) => {
            json!(format!("StorageTexelBuffer({})", access2str(x)))
        },
        DescriptorType::StorageBuffer(x) => json!(format!("StorageBuffer({})", access2str(x))),
        DescriptorType::InputAttachment(idx) => json!(format!("InputAttachment({})", idx)),
        x => json!(format!("{:?}", x)),
    }
}
fn ty2json(refl: &Reflection, idx: TypeIdx) -> serde_json::Value {
    let ty = match refl.ty(idx) {
        Some(x) => x,
        None => return json!(idx.to_string()),
    };
    match ty {
        TypeDesc::Vector { elem, nelem } => json!({
            "Kind": "Vector",
            "ElementType": ty2json(refl, *elem),
            "Count": nelem,
        }),
        TypeDesc::Matrix { col, ncol } => json!({
            "Kind": "Matrix",
            "VectorType": ty2json(refl, *col),
            "Count": ncol,
        }),
        TypeDesc::Array { elem, nelem, stride } => json!({
            "Kind": "Array",
            "ElementType": ty2json(refl, *elem),
            "Count": nelem,
            "Stride": stride,
        }),
        TypeDesc::RuntimeArray { elem, stride } => json!({
            "Kind": "RuntimeArray",
            "ElementType": ty2json(refl, *elem),
            "Stride": stride,
        }),
        TypeDesc::Struct(x) => {
            let members = x.members.iter()
                .map(|member| json!({
                    "Name": member.name,
                    "Offset": member.offset,
                    "Size": member.nbyte,
                    "MatrixStride": member.mat_stride,
                    "AxisOrder": member.mat_major.map(|x| format!("{:?}", x)),
                    "Access": member.access.map(access2str),
                    "MemberType": ty2json(refl, member.ty),
                }))
                .collect::<Vec<_>>();
            json!({
                "Kind": "Struct",
                "Name": x.name,
                "Members": members,
            })
        },
        TypeDesc::Pointer { store_cls, pointee } => json!({
            "Kind": "Pointer",
            "StorageClass": format!("{:?}", store_cls),
            "TargetType": ty2json(refl, *pointee),
        }),
        TypeDesc::CombinedImageSampler { img } => json!({
            "Kind": "CombinedImageSampler",
            "ImageType": ty2json(refl, *img),
        }),
        x => json!(format!("{:?}", x)),
    }
}
fn interface2json(refl: &Reflection, var: &InterfaceVariable) -> serde_json::Value {
    json!({
        "Name": var.name,
        "Location": var.location,
        "Component": var.component,
        "Type": ty2json(refl, var.ty),
    })
}
fn entry_point2json(refl: &Reflection, entry_point: &EntryPoint) -> serde_json::Value {
    let descs = entry_point.descs.iter()
        .map(|desc| json!({
            "Name": desc.name,
            "Set": desc.set,
            "Binding": desc.binding,
            "DescriptorType": desc_ty2json(desc.desc_ty),
            "Type": ty2json(refl, desc.ty),
            "Count": desc.count(),
        }))
        .collect::<Vec<_>>();
    let push_consts = entry_point.push_consts.iter()
        .map(|push_const| json!({
            "Name": push_const.name,
            "Size": push_const.nbyte,
            "Type": ty2json(refl, push_const.ty),
        }))
        .collect::<Vec<_>>();
    let spec_consts = entry_point.spec_consts.iter()
        .map(|spec_const| json!({
            "Name": spec_const.name,
            "SpecId": spec_const.spec_id,
            "Value": spec_const.value.map(|x| x.to_string()),
            "IsOverridden": spec_const.is_overridden,
            "Type": ty2json(refl, spec_const.ty),
        }))
        .collect::<Vec<_>>();
    let exec_modes = entry_point.exec_modes.iter()
        .map(|exec_mode| {
            let operands = exec_mode.operands.iter()
                .map(|operand| json!({
                    "Value": operand.value.map(|x| x.to_string()),
                    "SpecId": operand.spec_id,
                }))
                .collect::<Vec<_>>();
            json!({
                "ExecutionMode": exec_mode.exec_mode,
                "Operands": operands,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "EntryPoint": entry_point.name,
        "ExecutionModel": format!("{:?}", entry_point.exec_model),
        "ExecutionModes": exec_modes,
        "LocalSize": entry_point.local_size,
        "Variables": {
            "Inputs": entry_point.inputs.iter().map(|x| interface2json(refl, x)).collect::<Vec<_>>(),
            "Outputs": entry_point.outputs.iter().map(|x| interface2json(refl, x)).collect::<Vec<_>>(),
            "Descriptors": descs,
            "PushConstants": push_consts,
            "SpecConstants": spec_consts,
        },
    })
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = ReflectConfig::new();
    cfg.ref_all_rscs(args.ref_all)
        .combine_img_samplers(args.combine)
        .gen_unique_names(args.unique_names);
    for &(spec_id, value) in args.spec.iter() {
        cfg.specialize(spec_id, value.to_le_bytes().to_vec());
    }

    let mut nfail = 0;
    let mut modules = Vec::new();
    for path in args.paths.iter() {
        let spv = match load_spirv(path) {
            Some(x) => x,
            None => { nfail += 1; continue; },
        };
        match cfg.spv(spv).reflect() {
            Ok(refl) => {
                info!("reflected '{}'", path);
                if refl.entry_points().is_empty() {
                    warn!("'{}' has no entry point", path);
                }
                let entry_points = refl.entry_points().iter()
                    .map(|x| entry_point2json(&refl, x))
                    .collect::<Vec<_>>();
                modules.push(json!({
                    "Path": path,
                    "EntryPoints": entry_points,
                }));
            },
            Err(e) => {
                error!("cannot reflect '{}': {}", path, e);
                nfail += 1;
            },
        }
    }

    let json = match serde_json::to_string_pretty(&modules) {
        Ok(x) => x,
        Err(e) => {
            error!("cannot serialize reflection: {}", e);
            exit(1);
        },
    };
    match args.out_path {
        Some(ref out_path) => {
            let res = File::create(out_path)
                .and_then(|mut f| writeln!(f, "{}", json));
            if let Err(e) = res {
                error!("cannot write to '{}': {}", out_path, e);
                exit(1);
            }
        },
        None => println!("{}", json),
    }
    if nfail > 0 {
        exit(1);
    }
}
