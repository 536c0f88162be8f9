//! Permission module.

use anyhow::{bail, Error};
use std::{fmt, str::FromStr};

/// Enumeration describing the permissions that give access to private user data.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum DangerousPermission {
    AndroidPermissionAccessFineLocation,
    AndroidPermissionCamera,
    AndroidPermissionReadContacts,
    AndroidPermissionReadSms,
    AndroidPermissionRecordAudio,
    AndroidPermissionSendSms,
    AndroidPermissionWriteExternalStorage,
}

impl DangerousPermission {
    /// Gets the fully qualified name of the permission.
    pub fn as_str(self) -> &'static str {
        match self {
            DangerousPermission::AndroidPermissionAccessFineLocation => {
                "android.permission.ACCESS_FINE_LOCATION"
            }
            DangerousPermission::AndroidPermissionCamera => "android.permission.CAMERA",
            DangerousPermission::AndroidPermissionReadContacts => {
                "android.permission.READ_CONTACTS"
            }
            DangerousPermission::AndroidPermissionReadSms => "android.permission.READ_SMS",
            DangerousPermission::AndroidPermissionRecordAudio => "android.permission.RECORD_AUDIO",
            DangerousPermission::AndroidPermissionSendSms => "android.permission.SEND_SMS",
            DangerousPermission::AndroidPermissionWriteExternalStorage => {
                "android.permission.WRITE_EXTERNAL_STORAGE"
            }
        }
    }

    /// Gets a short description of the data the permission exposes.
    pub fn description(self) -> &'static str {
        match self {
            DangerousPermission::AndroidPermissionAccessFineLocation => {
                "precise location of the device"
            }
            DangerousPermission::AndroidPermissionCamera => "camera pictures and video",
            DangerousPermission::AndroidPermissionReadContacts => "contact list",
            DangerousPermission::AndroidPermissionReadSms => "received text messages",
            DangerousPermission::AndroidPermissionRecordAudio => "microphone audio",
            DangerousPermission::AndroidPermissionSendSms => "sending text messages",
            DangerousPermission::AndroidPermissionWriteExternalStorage => "shared storage files",
        }
    }
}

impl fmt::Display for DangerousPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DangerousPermission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "android.permission.ACCESS_FINE_LOCATION" => {
                Ok(DangerousPermission::AndroidPermissionAccessFineLocation)
            }
            "android.permission.CAMERA" => Ok(DangerousPermission::AndroidPermissionCamera),
            "android.permission.READ_CONTACTS" => {
                Ok(DangerousPermission::AndroidPermissionReadContacts)
            }
            "android.permission.READ_SMS" => Ok(DangerousPermission::AndroidPermissionReadSms),
            "android.permission.RECORD_AUDIO" => {
                Ok(DangerousPermission::AndroidPermissionRecordAudio)
            }
            "android.permission.SEND_SMS" => Ok(DangerousPermission::AndroidPermissionSendSms),
            "android.permission.WRITE_EXTERNAL_STORAGE" => {
                Ok(DangerousPermission::AndroidPermissionWriteExternalStorage)
            }
            _ => bail!("`{}` is not a dangerous permission", s),
        }
    }
}
